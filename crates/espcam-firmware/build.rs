fn main() {
    // WIFI_* settings come from .env next to this crate
    dotenv_build::output(dotenv_build::Config::default()).unwrap();

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
