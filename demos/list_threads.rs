//! Call `forums/listThreads` once and print the first page.
//!
//! Run:
//! `DISQUS_SECRET_KEY=<key> DISQUS_INTERFACES=interfaces.json cargo run --example list_threads`
//!
//! Optional env vars:
//! - `DISQUS_FORUM` (defaults to `disqus`)

use disqus_api::{DisqusApi, Interface, Params};

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

    let interface = Interface::from_json_str(&std::fs::read_to_string(interfaces)?)?;
    let api = DisqusApi::new(interface).with_secret_key(secret_key);

    let response = api
        .resource("forums/listThreads")
        .call(Params::new().with("forum", forum))?;

    match response.as_page() {
        Some(page) => {
            println!("{page}");
            println!("more pages: {}", page.cursor().more);
        }
        None => println!("{}", serde_json::to_string_pretty(&response.into_value())?),
    }
    Ok(())
}
