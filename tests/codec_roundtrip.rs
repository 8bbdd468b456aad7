use base64::Engine;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use pixelvault_lib::{
    stego, stego_crypto, stego_frame, AspectRatio, Channel, Codec, CodecConfig, Direction, ErrorKind,
};
use std::io::Cursor;

const ALL_CHANNELS: [Channel; 4] = [Channel::Red, Channel::Green, Channel::Blue, Channel::Alpha];

fn codec(direction: Direction, key: &str, channel: Channel, aspect: AspectRatio, level: i32) -> Codec {
    Codec::new(
        CodecConfig::builder()
            .direction(direction)
            .encryption_key(key)
            .channel(channel)
            .aspect_ratio(aspect)
            .compression_level(level)
            .build()
            .unwrap(),
    )
}

fn sample_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + 7) % 256) as u8).collect()
}

fn png_bytes(img: &RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

fn gradient_carrier(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

#[test]
fn roundtrip_every_channel_aspect_and_level() {
    let payload = sample_payload(700);
    let aspects = [
        AspectRatio::Auto,
        AspectRatio::Square,
        AspectRatio::SmallScreen,
        AspectRatio::WideScreen,
    ];
    for channel in ALL_CHANNELS {
        for aspect in aspects {
            for level in [-1, 1, 9] {
                let image = codec(Direction::Encode, "key", channel, aspect, level)
                    .convert(&payload, None)
                    .unwrap();
                let back = codec(Direction::Decode, "key", channel, aspect, level)
                    .convert(&image.bytes, None)
                    .unwrap();
                assert_eq!(back.bytes, payload, "{:?} {:?} {}", channel, aspect, level);
            }
        }
    }
}

#[test]
fn roundtrip_with_full_length_key_and_one_byte_payload() {
    let key = "k".repeat(32);
    let image = codec(Direction::Encode, &key, Channel::Red, AspectRatio::Auto, 6)
        .convert(b"x", None)
        .unwrap();
    let back = codec(Direction::Decode, &key, Channel::Red, AspectRatio::Auto, 6)
        .convert(&image.bytes, None)
        .unwrap();
    assert_eq!(back.bytes, b"x");
}

#[test]
fn carrier_roundtrip_png_and_jpeg() {
    let payload = sample_payload(1500);

    let png_carrier = png_bytes(&gradient_carrier(64, 48));
    let rgb = RgbImage::from_fn(40, 30, |x, y| Rgb([(x * 3) as u8, (y * 3) as u8, 90]));
    let mut jpeg_carrier = Cursor::new(Vec::new());
    rgb.write_to(&mut jpeg_carrier, image::ImageFormat::Jpeg).unwrap();
    let jpeg_carrier = jpeg_carrier.into_inner();

    for carrier in [&png_carrier, &jpeg_carrier] {
        for channel in ALL_CHANNELS {
            let image = codec(Direction::Encode, "cover", channel, AspectRatio::Auto, -1)
                .convert(&payload, Some(carrier))
                .unwrap();
            let back = codec(Direction::Decode, "cover", channel, AspectRatio::Auto, -1)
                .convert(&image.bytes, None)
                .unwrap();
            assert_eq!(back.bytes, payload);
        }
    }
}

#[test]
fn carrier_shape_drives_auto_canvas() {
    let carrier = png_bytes(&gradient_carrier(160, 90));
    let image = codec(Direction::Encode, "k", Channel::Green, AspectRatio::Auto, 6)
        .convert(&sample_payload(3000), Some(&carrier))
        .unwrap();
    let img = image::load_from_memory(&image.bytes).unwrap();
    let ratio = img.width() as f64 / img.height() as f64;
    assert!((ratio - 16.0 / 9.0).abs() < 0.2, "ratio {}", ratio);
}

#[test]
fn canvas_always_fits_hidden_text() {
    for len in [1usize, 10, 100, 1000, 5000] {
        for aspect in [AspectRatio::Square, AspectRatio::SmallScreen, AspectRatio::WideScreen] {
            let image = codec(Direction::Encode, "k", Channel::Red, aspect, 6)
                .convert(&sample_payload(len), None)
                .unwrap();
            let img = image::load_from_memory(&image.bytes).unwrap();
            let text = stego::extract(&image.bytes, Channel::Red).unwrap();
            assert!((img.width() as usize) * (img.height() as usize) >= text.len() + 1);
        }
    }
}

#[test]
fn wrong_key_is_authentication_failure() {
    let image = codec(Direction::Encode, "right key", Channel::Blue, AspectRatio::Auto, 6)
        .convert(b"confidential", None)
        .unwrap();
    let err = codec(Direction::Decode, "wrong key", Channel::Blue, AspectRatio::Auto, 6)
        .convert(&image.bytes, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
}

#[test]
fn wrong_channel_finds_nothing_usable() {
    let carrier = png_bytes(&RgbaImage::from_pixel(20, 20, Rgba([200, 200, 200, 255])));
    let image = codec(Direction::Encode, "k", Channel::Red, AspectRatio::Auto, 6)
        .convert(b"payload", Some(&carrier))
        .unwrap();
    let err = codec(Direction::Decode, "k", Channel::Green, AspectRatio::Auto, 6)
        .convert(&image.bytes, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyPayload);
}

#[test]
fn tampered_ciphertext_never_decodes_silently() {
    let payload = sample_payload(400);
    let image = codec(Direction::Encode, "k", Channel::Red, AspectRatio::Auto, 6)
        .convert(&payload, None)
        .unwrap();
    let text = stego::extract(&image.bytes, Channel::Red).unwrap();
    let envelope = base64::engine::general_purpose::STANDARD.decode(&text).unwrap();

    for pos in (stego_crypto::IV_LEN..envelope.len()).step_by(7) {
        let mut damaged = envelope.clone();
        damaged[pos] ^= 0x5a;
        let damaged_text = base64::engine::general_purpose::STANDARD.encode(&damaged);
        let damaged_image = stego::embed(damaged_text.as_bytes(), Channel::Red, AspectRatio::Auto, None).unwrap();
        let err = codec(Direction::Decode, "k", Channel::Red, AspectRatio::Auto, 6)
            .convert(&damaged_image, None)
            .unwrap_err();
        assert!(
            matches!(err.kind(), ErrorKind::AuthenticationFailure | ErrorKind::ChecksumMismatch),
            "byte {} gave {:?}",
            pos,
            err
        );
    }
}

#[test]
fn checksum_toggle_lets_bad_checksum_through() {
    // A frame that encrypts fine but carries the wrong checksum.
    let mut frame = stego_frame::wrap(b"original bytes", 6, None).unwrap();
    let digit = stego_frame::CHECKSUM_TAG.len();
    frame[digit] = if frame[digit] == b'0' { b'1' } else { b'0' };
    let envelope = stego_crypto::encrypt(&frame, "k", false).unwrap();
    let text = base64::engine::general_purpose::STANDARD.encode(&envelope);
    let image = stego::embed(text.as_bytes(), Channel::Red, AspectRatio::Auto, None).unwrap();

    let err = codec(Direction::Decode, "k", Channel::Red, AspectRatio::Auto, 6)
        .convert(&image, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);

    let lenient = Codec::new(
        CodecConfig::builder()
            .direction(Direction::Decode)
            .encryption_key("k")
            .validate_checksum(false)
            .build()
            .unwrap(),
    );
    assert_eq!(lenient.convert(&image, None).unwrap().bytes, b"original bytes");
}

#[test]
fn original_filename_travels_with_the_data() {
    let encode = Codec::new(
        CodecConfig::builder()
            .encryption_key("k")
            .original_filename(Some("quarterly report.xlsx"))
            .build()
            .unwrap(),
    );
    let image = encode.convert(b"numbers", None).unwrap();
    assert_eq!(image.file_name, "quarterly report.png");

    let decode = Codec::new(
        CodecConfig::builder()
            .direction(Direction::Decode)
            .encryption_key("k")
            .build()
            .unwrap(),
    );
    let back = decode.convert(&image.bytes, None).unwrap();
    assert_eq!(back.bytes, b"numbers");
    assert_eq!(back.file_name, "quarterly report.xlsx");
}

#[test]
fn fallback_cipher_roundtrip_and_mismatch() {
    let build = |direction, fallback| {
        Codec::new(
            CodecConfig::builder()
                .direction(direction)
                .encryption_key("short")
                .use_fallback_cipher(fallback)
                .build()
                .unwrap(),
        )
    };
    let image = build(Direction::Encode, true).convert(b"legacy mode", None).unwrap();
    assert_eq!(
        build(Direction::Decode, true).convert(&image.bytes, None).unwrap().bytes,
        b"legacy mode"
    );
    // A short key is padded differently by the two backends.
    let err = build(Direction::Decode, false)
        .convert(&image.bytes, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
}

#[test]
fn decoding_a_plain_picture_fails_cleanly() {
    let picture = png_bytes(&gradient_carrier(30, 30));
    let result = codec(Direction::Decode, "k", Channel::Red, AspectRatio::Auto, 6).convert(&picture, None);
    assert!(result.is_err());
}

#[test]
fn decoding_garbage_is_image_decode_failure() {
    let err = codec(Direction::Decode, "k", Channel::Red, AspectRatio::Auto, 6)
        .convert(b"this is not an image at all", None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ImageDecodeFailure);
}
