//! Basic example demonstrating simple GET and POST requests.
//!
//! This example shows how to:
//! - Create a client with a base URL
//! - Fill path variables and query parameters
//! - Send a JSON body
//! - Keep the raw response for manual handling
//!
//! Run with: `cargo run --example basic_call`

use serde::{Deserialize, Serialize};
use wirefetch::{Client, RequestOptions, ResolveMode};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Clone, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("wirefetch=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")
        .build()?;

    println!("=== GET Request Example ===");
    let post: Post = client
        .fetch(
            "/posts/:id",
            &RequestOptions::new().path_variable("id", "1"),
        )
        .await?
        .into_json()?;

    println!("Post ID: {}", post.id);
    println!("Title: {}", post.title);
    println!();

    println!("=== Query Parameters ===");
    let posts: Vec<Post> = client
        .fetch(
            "/posts",
            &RequestOptions::new().query("userId", 1).query("id", vec![1, 2, 3]),
        )
        .await?
        .into_json()?;
    println!("Found {} posts", posts.len());
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };
    let created: Post = client.post("/posts", &new_post).await?.into_json()?;
    println!("Created post ID: {}", created.id);
    println!();

    println!("=== Raw Response Example ===");
    let response = client
        .fetch(
            "/posts/1",
            &RequestOptions::new().resolve(ResolveMode::Response),
        )
        .await?
        .into_response()
        .ok_or("expected a response")?;
    println!("Status code: {}", response.status());
    println!("Content-Type: {:?}", response.header("content-type"));
    println!("Body length: {} bytes", response.bytes().await?.len());

    Ok(())
}
