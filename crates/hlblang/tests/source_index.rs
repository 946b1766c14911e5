use hlblang::source::IndexedBuffer;

#[test]
fn appends_synthetic_newline() {
    let ib = IndexedBuffer::from_bytes(b"fs x() {}".to_vec());
    assert_eq!(ib.bytes().last(), Some(&b'\n'));
    assert_eq!(ib.line_count(), 1);
}

#[test]
fn keeps_existing_newline() {
    let ib = IndexedBuffer::from_bytes(b"a\n".to_vec());
    assert_eq!(ib.bytes(), b"a\n");
    assert_eq!(ib.line_count(), 1);
}

#[test]
fn reads_lines_by_number() {
    let ib = IndexedBuffer::from_bytes(b"a\nbb\nccc\n".to_vec());
    assert_eq!(ib.line(1), Some(&b"a"[..]));
    assert_eq!(ib.line(2), Some(&b"bb"[..]));
    assert_eq!(ib.line(3), Some(&b"ccc"[..]));
    assert_eq!(ib.line(4), None);
    assert_eq!(ib.line(0), None);
}

#[test]
fn segment_covers_the_whole_line() {
    let ib = IndexedBuffer::from_bytes(b"a\nbb\nccc\n".to_vec());
    // offset 5 is the first 'c'
    assert_eq!(ib.segment(5), Some(&b"ccc"[..]));
    assert_eq!(ib.segment(2), Some(&b"bb"[..]));
}

#[test]
fn position_for_is_one_based() {
    let ib = IndexedBuffer::from_bytes(b"a\nbb\nccc\n".to_vec());
    assert_eq!(ib.position_for(0), Some((1, 1)));
    assert_eq!(ib.position_for(2), Some((2, 1)));
    assert_eq!(ib.position_for(3), Some((2, 2)));
    assert_eq!(ib.position_for(7), Some((3, 3)));
    assert_eq!(ib.position_for(999), None);
}
