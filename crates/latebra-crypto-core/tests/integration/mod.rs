mod codec_roundtrip;
