pub mod data;
pub mod migrations;

pub use data::Database;

pub fn print_banner() {
    println!(
        r#"
 _              _        _ _
| |_ __ _  __ _| |_ __ _| | |_   _
| __/ _` |/ _` | __/ _` | | | | | |
| || (_| | (_| | || (_| | | | |_| |
 \__\__,_|\__, |\__\__,_|_|_|\__, |
          |___/              |___/
"#
    );
    println!("  tagtally v{}", env!("CARGO_PKG_VERSION"));
    println!();
}
