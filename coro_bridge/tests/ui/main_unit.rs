use coro_bridge::{Bridge, Input, yield_now};

#[coro_bridge::main]
async fn main() {
    assert!(coro_bridge::runtime::in_context());
    yield_now().await;

    let mut seen = None;
    Bridge::new().call(Input::value(7), |v| seen = Some(v)).unwrap();
    assert_eq!(seen, Some(7));
}
