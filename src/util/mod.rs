// Utility Module
// File naming and key location helpers

pub mod file_ops;

pub use file_ops::{decrypted_output_path, encrypted_output_path, format_file_size, KeyPaths};
