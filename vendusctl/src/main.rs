use clap::Parser;
use console::style;

#[tokio::main]
async fn main() {
    let cli = vendusctl::Cli::parse();
    vendusctl::init_tracing(cli.verbose);
    if let Err(err) = vendusctl::run(cli).await {
        eprintln!();
        eprintln!("{}", err.report());
        println!("{}", style("Program exited due to error.").red());
        std::process::exit(1);
    }
}
