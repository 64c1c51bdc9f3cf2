fn main() {
    if let Err(err) = interaction_flow_graph::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
