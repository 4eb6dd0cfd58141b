fn main() {
    if let Err(err) = paramgraph::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
