pub mod dumper;
pub mod error;

#[cfg(test)]
mod tests;
