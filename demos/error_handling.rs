//! Example demonstrating the error action and the `handled` flag.
//!
//! This example shows how to:
//! - Tell transport failures apart from build failures
//! - Mark an error as handled so the call returns `Ok(())`
//! - Let an unhandled error propagate to the caller
//! - Observe the outcome in the complete action
//!
//! Run with: `cargo run --example error_handling`

use callwire::{Client, Error, ErrorContext, Logger, RequestOptions, RequestType};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("callwire=info")
        .init();

    println!("=== Example 1: Handled Transport Error ===");
    // Nothing listens on port 1, so the connection is refused
    let lenient = Client::builder()
        .base_url("http://127.0.0.1:1")?
        .timeout(Duration::from_secs(2))
        .error(|err| {
            if err.context() == ErrorContext::ClientError {
                err.warning(format!("transport failed: {}", err.cause()), Some("demo"), None);
                err.handled = true;
            }
        })
        .complete(|ctx| {
            if let Some(err) = ctx.error() {
                println!("Completed with handled error: {}", err.cause());
            }
        })
        .build()?;

    match lenient.get(RequestOptions::new()).await {
        Ok(()) => println!("Call returned Ok(())"),
        Err(e) => println!("Unexpected error: {}", e),
    }
    println!();

    println!("=== Example 2: Unhandled Transport Error ===");
    let strict = Client::builder()
        .base_url("http://127.0.0.1:1")?
        .error(|err| println!("Error action saw: {:?}", err.context()))
        .complete(|_| println!("Never printed: unhandled errors skip completion"))
        .build()?;

    match strict.get(RequestOptions::new()).await {
        Ok(()) => println!("Unexpected success"),
        Err(e) => {
            println!("Error propagated: {}", e);
            println!("  Is transport error: {}", e.is_transport_error());
        }
    }
    println!();

    println!("=== Example 3: Build Failures ===");
    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .route("posts/{id}")
        .build()?;

    // The route needs an id that is never supplied
    match client.get(RequestOptions::new()).await {
        Err(Error::RouteParamNotDefined(name)) => println!("Missing route parameter: {}", name),
        other => println!("Unexpected: {:?}", other),
    }

    // Malformed XML is rejected before anything is sent
    let opts = RequestOptions::new()
        .route_param("id", 1)
        .request_type(RequestType::Xml)
        .content("<post><title>unclosed</post>");
    match client.put(opts).await {
        Err(Error::XmlParse(reason)) => println!("Invalid XML body: {}", reason),
        other => println!("Unexpected: {:?}", other),
    }

    Ok(())
}
