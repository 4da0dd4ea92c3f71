use tempo_swap_client::cli::run_cli;

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to start runtime: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = runtime.block_on(run_cli()) {
        eprintln!("Error: {}", err.to_string().lines().next().unwrap_or_default());
        std::process::exit(1);
    }
}
