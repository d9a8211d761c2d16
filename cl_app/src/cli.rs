/// Positional argument `index` (1-based, 0 is the program), or `default`
pub fn get_arg(index: usize, default: &str) -> String {
    arg_from(std::env::args(), index, default)
}

fn arg_from<I: IntoIterator<Item = String>>(args: I, index: usize, default: &str) -> String {
    args.into_iter().nth(index).unwrap_or_else(|| default.to_string())
}
