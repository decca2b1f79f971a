//! Output writers (generated list, human summary and JSONL report)

pub mod generator;
pub mod human;
pub mod jsonl;

pub use generator::ListGenerator;
pub use human::HumanFormatter;
pub use jsonl::JsonlFormatter;
