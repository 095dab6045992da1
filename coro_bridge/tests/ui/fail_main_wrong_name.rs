#[coro_bridge::main]
async fn run() {}

fn main() {}
