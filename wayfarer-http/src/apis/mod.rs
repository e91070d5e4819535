pub mod adk;
