//! Tool Runner Example
//!
//! Lists the tools behind a bridge and optionally runs one of them, walking
//! through any authentication the tool asks for.
//!
//! ## Usage
//!
//! Configure the client:
//! ```bash
//! export TOOLBRIDGE_API_KEY="your-key-here"
//! export TOOLBRIDGE_BASE_URL="https://platform.example.com"
//! export TOOLBRIDGE_AUTH_MOD_BASE_URL="https://auth.example.com"
//! ```
//!
//! List tools in OpenAI shape, then run one natively:
//! ```bash
//! cargo run -p tool-runner -- bridge-1 openai
//! cargo run -p tool-runner -- bridge-1 native lookup_user '{"email":"bob@example.com"}'
//! ```

use serde_json::Value;
use toolbridge::{
    AuthenticationRequestEvent, ClientConfig, Native, OpenAi, Provider, ProviderKind,
    ToolBridgeClient,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: tool-runner <bridge-uid> [native|openai] [tool-name] [json-params]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(bridge_uid) = args.next() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };
    let provider: ProviderKind = args.next().unwrap_or_default().parse()?;
    let tool_name = args.next();
    let params = args
        .next()
        .map(|raw| serde_json::from_str::<Value>(&raw))
        .transpose()?;

    let config = ClientConfig::from_env()?;
    match provider {
        ProviderKind::Native => {
            let client = ToolBridgeClient::new(config, Native)?;
            run(client, &bridge_uid, tool_name.as_deref(), params.as_ref()).await
        }
        ProviderKind::OpenAi => {
            let client = ToolBridgeClient::new(config, OpenAi)?;
            run(client, &bridge_uid, tool_name.as_deref(), params.as_ref()).await
        }
    }
}

async fn run<P: Provider>(
    mut client: ToolBridgeClient<P>,
    bridge_uid: &str,
    tool_name: Option<&str>,
    params: Option<&Value>,
) -> Result<(), Box<dyn std::error::Error>> {
    client.on_authentication_request(open_in_terminal);

    let tools = client.get_tools(bridge_uid, &[]).await?;
    println!("=== Tools on {bridge_uid} ({}) ===", client.provider().kind());
    println!("{}", serde_json::to_string_pretty(&tools)?);

    let Some(tool_name) = tool_name else {
        return Ok(());
    };

    tracing::info!(tool = tool_name, "Running tool");
    match client.run_tool_natively(bridge_uid, tool_name, params).await {
        Ok(Some(result)) => println!("\n{tool_name}: {}", serde_json::to_string_pretty(&result)?),
        Ok(None) => println!("\n{tool_name}: no output"),
        Err(error) => {
            for detail in error.sdk_errors() {
                eprintln!("\nError [{}]: {}", detail.code, detail.message);
            }
            return Err(error.into());
        }
    }
    Ok(())
}

fn open_in_terminal(event: AuthenticationRequestEvent) {
    println!(
        "\nTool call {} needs {:?} authentication.",
        event.tool_call_id, event.challenge.authentication_type
    );
    let poller = event.poller.clone();
    poller.handle_authentication_request(event, &|url: &str| {
        println!("Open this link to continue: {url}\n");
    });
}
