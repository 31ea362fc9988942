use candle_core::Result;

fn main() -> Result<()> {
    rbc_examples::digits::run()
}
