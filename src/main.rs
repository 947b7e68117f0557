use sitepp::run;

fn main() {
    let args = run::parse_args();
    run::args(&args);
}
