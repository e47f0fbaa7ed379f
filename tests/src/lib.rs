#[cfg(test)]
mod topology;
