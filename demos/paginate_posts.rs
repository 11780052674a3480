//! Follow cursors across `forums/listPosts` and print each post id.
//!
//! Run:
//! `DISQUS_SECRET_KEY=<key> DISQUS_INTERFACES=interfaces.json cargo run --example paginate_posts`
//!
//! Optional env vars:
//! - `DISQUS_FORUM` (defaults to `disqus`)
//! - `DISQUS_POST_LIMIT` (defaults to `250`)

use disqus_api::{DisqusApi, Interface, Paginator, Params};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let secret_key = match std::env::var("DISQUS_SECRET_KEY") {
        Ok(value) => value,
        Err(_) => {
            eprintln!("Set DISQUS_SECRET_KEY before running this example.");
            std::process::exit(2);
        }
    };
    let interfaces =
        std::env::var("DISQUS_INTERFACES").unwrap_or_else(|_| "interfaces.json".to_owned());
    let forum = std::env::var("DISQUS_FORUM").unwrap_or_else(|_| "disqus".to_owned());
    let limit: usize = std::env::var("DISQUS_POST_LIMIT")
        .unwrap_or_else(|_| "250".to_owned())
        .parse()?;

    let interface = Interface::from_json_str(&std::fs::read_to_string(interfaces)?)?;
    let api = DisqusApi::new(interface).with_secret_key(secret_key);

    let paginator = Paginator::new(
        api.resource("forums/listPosts"),
        Params::new().with("forum", forum).with("limit", 100),
    );

    let mut count = 0usize;
    for post in paginator.run(Some(limit), true) {
        let post = post?;
        count += 1;
        println!("{}", post.get("id").unwrap_or(&serde_json::Value::Null));
    }
    eprintln!("fetched {count} posts");
    Ok(())
}
