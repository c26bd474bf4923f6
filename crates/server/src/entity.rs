pub mod session_entry;
