#[coro_bridge::test]
async fn takes_input(value: u8) {
    assert_eq!(value, 1);
}

fn main() {}
