//! Example demonstrating error handling.
//!
//! This example shows how to:
//! - Tell the error kinds apart
//! - Access the raw response body of a failed call
//! - Observe every failure with an error hook
//! - Branch on status codes with `has_status`
//!
//! Run with: `cargo run --example error_handling`

use std::time::Duration;
use wirefetch::{AbortSignal, Client, Error, RequestOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("wirefetch=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")
        .on_error(|e| eprintln!("[hook] {}", e))
        .build()?;

    println!("=== Example 1: Handling HTTP Errors ===");
    match client.get("/posts/999999").await {
        Ok(resolved) => println!("Success: {:?}", resolved),
        Err(Error::NotOk {
            method,
            response,
            raw_response,
        }) => {
            println!("HTTP Error!");
            println!("  Method: {}", method);
            println!("  Status: {}", response.status);
            println!("  Is client error (4xx): {}", response.status.is_client_error());
            println!("  Raw response: {}", raw_response);
            println!("  Content-Type: {:?}", response.content_type());
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 2: Branching on Status ===");
    if let Err(e) = client.delete("/does-not-exist/1").await {
        if e.has_status(404) {
            println!("Nothing to delete");
        } else {
            println!("Unexpected failure: {}", e);
        }
    }
    println!();

    println!("=== Example 3: Aborting a Request ===");
    let signal = AbortSignal::new();
    let trigger = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        trigger.cancel();
    });
    match client
        .fetch("/posts", &RequestOptions::new().signal(signal))
        .await
    {
        Err(Error::Transport { source, .. }) => println!("Transport failure: {}", source),
        Err(e) => println!("Other error: {}", e),
        Ok(_) => println!("Finished before the abort fired"),
    }
    println!();

    println!("=== Example 4: Guard Checks ===");
    let signed_in = false;
    let result: Result<(), Error> = if signed_in {
        Ok(())
    } else {
        Err(Error::guard("sign in before loading the dashboard"))
    };
    if let Err(e) = result {
        println!("Guard failed: {}", e);
        println!("  Has response: {}", e.response().is_some());
    }

    Ok(())
}
