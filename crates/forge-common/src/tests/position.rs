use super::*;

#[test]
fn single_line() {
    let map = LineMap::build("hello");
    assert_eq!(map.line_count(), 1);
    assert_eq!(map.offset_to_position(3), Position::new(0, 3));
}

#[test]
fn multi_line() {
    let map = LineMap::build("ab\ncd\nef");
    assert_eq!(map.line_count(), 3);
    assert_eq!(map.offset_to_position(0), Position::new(0, 0));
    assert_eq!(map.offset_to_position(3), Position::new(1, 0));
    assert_eq!(map.offset_to_position(4), Position::new(1, 1));
    assert_eq!(map.offset_to_position(7), Position::new(2, 1));
}

#[test]
fn crlf_line_endings() {
    let map = LineMap::build("ab\r\ncd");
    assert_eq!(map.line_count(), 2);
    assert_eq!(map.offset_to_position(4), Position::new(1, 0));
}

#[test]
fn line_start_lookup() {
    let map = LineMap::build("ab\ncd");
    assert_eq!(map.line_start(0), Some(0));
    assert_eq!(map.line_start(1), Some(3));
    assert_eq!(map.line_start(2), None);
}
