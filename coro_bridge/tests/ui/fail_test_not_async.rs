#[coro_bridge::test]
fn checks_nothing() {}

fn main() {}
