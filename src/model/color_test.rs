use super::*;

#[test]
fn web_parses_hex_with_and_without_hash() {
    let orange = Color::web("#FF8C00", 0.3).expect("valid");
    assert_eq!((orange.red, orange.green, orange.blue), (0xFF, 0x8C, 0x00));
    assert_eq!(orange.opacity, 0.3);
    assert_eq!(Color::web("32cd32", 1.0).expect("valid"), Color::LIME_GREEN);
}

#[test]
fn web_rejects_malformed_input() {
    assert!(Color::web("#FFF", 1.0).is_err());
    assert!(Color::web("#GG0000", 1.0).is_err());
    assert!(Color::web("#FF0000", 1.5).is_err());
    assert!(Color::web("#+f+f+f", 1.0).is_err());
    assert!(Color::web("+fffff", 1.0).is_err());
    assert!(Color::web("#ff\u{e9}ff", 1.0).is_err());
}

#[test]
fn rgba_carries_opacity_as_alpha() {
    let rgba = Color::RED.translucent(0.7).rgba();
    assert_eq!(rgba, protocol::Rgba { red: 255, green: 0, blue: 0, alpha: 0.7 });
}
