use std::env;

use signage_core::{Resolver, classify};

/// Print how each link argument would be played
fn main() {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let no_loop = args.iter().any(|a| a == "--no-loop");
    args.retain(|a| a != "--no-loop");
    if args.is_empty() {
        eprintln!("Usage: resolve [--no-loop] <link or embed code>...");
        return;
    }

    let resolver = Resolver::new("http://localhost");
    for raw in &args {
        println!("{}", raw);
        println!("  provider: {}", classify(raw));
        match resolver.resolve(raw, !no_loop) {
            Some(source) => {
                println!("  render:   {:?}", source.kind);
                println!("  url:      {}", source.url);
            }
            None => println!("  not playable"),
        }
    }
}
