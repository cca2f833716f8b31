//! Basic example demonstrating route templates and status actions.
//!
//! This example shows how to:
//! - Create a client with a base URL and a route template
//! - Fill route parameters per call
//! - React to specific status codes with `ok` and `not_found`
//! - Send a JSON body with POST
//!
//! Run with: `cargo run --example basic_call`

use callwire::{Client, Error, Logger, RequestOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("callwire=debug,basic_call=info")
        .init();

    // Create a client for the JSONPlaceholder API
    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .route("posts/{id}")
        .ok(|result| match result.json::<Post>() {
            Ok(Some(post)) => {
                println!("Post ID: {}", post.id);
                println!("Title: {}", post.title);
            }
            Ok(None) => println!("Empty response"),
            Err(e) => println!("Unexpected body: {}", e),
        })
        .not_found(|result| {
            result.warning(format!("nothing at {}", result.request().url), Some("posts"), None);
        })
        .status(201, |result| {
            if let Ok(Some(post)) = result.json::<Post>() {
                println!("Created post ID: {}", post.id);
            }
        })
        .complete(|ctx| {
            if let Some(result) = ctx.result() {
                println!("Status code: {}", result.code());
                println!("Content-Type: {:?}", result.header("content-type"));
            }
            println!();
        })
        .build()?;

    println!("=== GET Request Example ===");
    client
        .get(RequestOptions::new().route_param("id", 1))
        .await?;

    println!("=== Missing Resource Example ===");
    client
        .get(RequestOptions::new().route_param("id", 999_999))
        .await?;

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };
    // The collection endpoint has no id; an empty value leaves "posts/"
    client
        .post(RequestOptions::new().route_param("id", "").json(&new_post)?)
        .await?;

    Ok(())
}
