use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Context;
use opcua::server::prelude::*;
use opcua::sync::RwLock;

use super::nodes::{populate, NodeLayout};
use crate::cache::SampleCache;
use crate::config::Config;
use crate::diagnosis::DiagnosisLed;

/// A configured server with its address space populated, not yet listening.
pub struct SensorServer {
    server: Server,
    layout: NodeLayout,
    endpoint: String,
}

impl SensorServer {
    pub fn new(
        config: &Config,
        cache: Arc<SampleCache>,
        led: Arc<DiagnosisLed>,
    ) -> anyhow::Result<Self> {
        let settings = &config.server;
        let server = ServerBuilder::new_anonymous(settings.application_name.as_str())
            .application_uri(settings.application_uri.as_str())
            .product_uri(settings.product_uri.as_str())
            .create_sample_keypair(settings.create_sample_keypair)
            .pki_dir(settings.pki_dir.as_str())
            .discovery_server_url(None)
            .host_and_port(settings.host.as_str(), settings.port)
            .server()
            .context("Invalid OPC UA server configuration")?;

        let layout = {
            let address_space = server.address_space();
            let mut address_space = address_space.write();
            populate(&mut address_space, config, cache, led)?
        };

        Ok(Self {
            server,
            layout,
            endpoint: format!("opc.tcp://{}:{}/", settings.host, settings.port),
        })
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    /// Runs the server on its own thread; it brings its own runtime.
    pub fn start(self) -> anyhow::Result<RunningServer> {
        tracing::info!("Starting OPC UA server on {}", self.endpoint);

        let server = Arc::new(RwLock::new(self.server));
        let runner = server.clone();
        let thread = std::thread::Builder::new()
            .name("opcua-server".into())
            .spawn(move || Server::run_server(runner))
            .context("Failed to spawn OPC UA server thread")?;

        Ok(RunningServer { server, thread })
    }
}

pub struct RunningServer {
    server: Arc<RwLock<Server>>,
    thread: JoinHandle<()>,
}

impl RunningServer {
    /// Asks the server to abort and waits for its thread. Blocks.
    pub fn stop(self) -> anyhow::Result<()> {
        self.server.write().abort();
        self.thread
            .join()
            .map_err(|_| anyhow::anyhow!("OPC UA server thread panicked"))?;
        tracing::info!("OPC UA server stopped");
        Ok(())
    }
}
