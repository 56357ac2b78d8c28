macro_rules! emit {
    ($translator:expr, $($format:tt)*) => {
        $translator.sink(|output| write!(output, $($format)*))
    };
}
