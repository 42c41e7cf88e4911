use airborne_city_sim::runner;

fn main() {
    if let Err(e) = runner::run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
