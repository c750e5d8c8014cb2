//! Command-line OPC UA client for checking a running sensor server.
//!
//! ```text
//! dht-probe [ENDPOINT] [on|off]
//! ```
//!
//! Prints temperature and humidity with their status codes and source
//! timestamps. With `on` or `off` it also calls `dropMessage` for the LED.
//! Node ids and the namespace URI come from the same config file as the
//! server (`DHT_OPCUA_CONFIG`).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use dht_opcua::config::{Config, CONFIG_ENV};
use opcua::client::prelude::*;
use opcua::sync::RwLock;

const DEFAULT_ENDPOINT: &str = "opc.tcp://localhost:16664/";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut endpoint = DEFAULT_ENDPOINT.to_string();
    let mut led = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "on" | "ON" => led = Some("ON"),
            "off" | "OFF" => led = Some("OFF"),
            url if url.starts_with("opc.tcp://") => endpoint = url.to_string(),
            other => bail!("Unexpected argument {other:?}; usage: dht-probe [ENDPOINT] [on|off]"),
        }
    }

    let config_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    let mut client = ClientBuilder::new()
        .application_name("dht-probe")
        .application_uri("urn:dht-probe")
        .create_sample_keypair(true)
        .trust_server_certs(true)
        .session_retry_limit(3)
        .client()
        .context("Invalid OPC UA client configuration")?;

    let session = client
        .connect_to_endpoint(
            (
                endpoint.as_str(),
                SecurityPolicy::None.to_str(),
                MessageSecurityMode::None,
                UserTokenPolicy::anonymous(),
            ),
            IdentityToken::Anonymous,
        )
        .with_context(|| format!("Failed to connect to {endpoint}"))?;

    let result = probe(&session, &config, led);
    session.read().disconnect();
    result
}

fn probe(session: &Arc<RwLock<Session>>, config: &Config, led: Option<&str>) -> anyhow::Result<()> {
    let session = session.read();
    let ns = namespace_index(&session, &config.server.namespace_uri)?;

    for (name, id) in [
        ("Temperature", config.nodes.temperature),
        ("Humidity", config.nodes.humidity),
    ] {
        let value = read_node(&session, NodeId::new(ns, id))?;
        let status = value.status.unwrap_or(StatusCode::Good);
        let reading = match &value.value {
            Some(Variant::Float(v)) => format!("{v:.1}"),
            Some(other) => format!("{other:?}"),
            None => "-".to_string(),
        };
        let taken = value
            .source_timestamp
            .map(|t| t.as_chrono().to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!("{name:<12} {reading:>8}  {status}  {taken}");
    }

    if let Some(message) = led {
        let object_id = NodeId::new(ns, config.nodes.peer_manager);
        let method_id = NodeId::new(ns, config.nodes.drop_message);
        let args = vec![
            Variant::from(config.diagnosis.receiver.as_str()),
            Variant::from(message),
        ];
        let result = session
            .call((object_id, method_id, Some(args)))
            .context("dropMessage call failed")?;
        println!("dropMessage {message:<3}   {}", result.status_code);
    }
    Ok(())
}

fn read_node(session: &Session, node_id: NodeId) -> anyhow::Result<DataValue> {
    let results = session
        .read(&[ReadValueId::from(node_id.clone())], TimestampsToReturn::Both, 0.0)
        .with_context(|| format!("Failed to read {node_id}"))?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No value returned for {node_id}"))
}

fn namespace_index(session: &Session, uri: &str) -> anyhow::Result<u16> {
    let value = read_node(session, VariableId::Server_NamespaceArray.into())?;
    if let Some(Variant::Array(array)) = &value.value {
        for (i, entry) in array.values.iter().enumerate() {
            if let Variant::String(s) = entry {
                if s.as_ref() == uri {
                    return Ok(i as u16);
                }
            }
        }
    }
    bail!("Server does not expose namespace {uri}")
}
