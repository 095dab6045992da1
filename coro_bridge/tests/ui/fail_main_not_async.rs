#[coro_bridge::main]
fn main() {}
