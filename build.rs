fn main() {
    // The ESP-IDF sysenv only exists when the espidf feature pulls in
    // esp-idf-sys; host test builds skip it entirely.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
