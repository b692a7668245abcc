use super::*;

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__PAINT_TEST_MISSING_KEY__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__PAINT_TEST_VALID__", "99") };
    let val: u32 = env_parse("__PAINT_TEST_VALID__", 0);
    assert_eq!(val, 99);
    unsafe { std::env::remove_var("__PAINT_TEST_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__PAINT_TEST_INVALID__", "wide") };
    let val: u32 = env_parse("__PAINT_TEST_INVALID__", 7);
    assert_eq!(val, 7);
    unsafe { std::env::remove_var("__PAINT_TEST_INVALID__") };
}

#[test]
fn default_config_matches_constants() {
    let config = ServerConfig::default();
    assert_eq!(config.port, 3000);
    assert_eq!((config.canvas_width, config.canvas_height), (512, 512));
    assert_eq!(config.max_brush_size, 64);
    assert_eq!(config.client_channel_capacity, 256);
    assert_eq!(config.log_fetch_limit, 0);
}
