fn main() {
    built::write_built_file().expect("Failed to generate build info");
}
