fn main() {
    // The ESP-IDF environment only exists when cross-compiling for the board.
    // Host builds (unit tests, simulation) skip it.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
