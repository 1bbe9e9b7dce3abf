// serve.rs: Start the gated MCP server on stdio.
//
// The delegate filesystem server is launched first; the gate only starts
// answering once the delegate handshake has completed.

use rmcp::ServiceExt;
use rg_mcp_gateway::{GatewayConfig, ReadGateServer};

pub fn execute(config: GatewayConfig) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let server = ReadGateServer::from_config(&config).await?;
        tracing::info!(
            name = %config.server_name,
            root = %config.workspace_root.display(),
            "read gate serving on stdio"
        );

        let transport = rmcp::transport::stdio();
        let server_handle = server
            .serve(transport)
            .await
            .map_err(|e| anyhow::anyhow!("MCP server error: {}", e))?;
        let _ = server_handle.waiting().await;
        Ok::<(), anyhow::Error>(())
    })
}
