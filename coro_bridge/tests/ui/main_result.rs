use std::error::Error;

#[coro_bridge::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let value = async { 21 * 2 }.await;
    assert_eq!(value, 42);
    Ok(())
}
