use proptest::prelude::*;

use doorbell_negotiation::sdp::{parse_sdp, Attribute, MediaSection, SessionDescription};
use doorbell_negotiation::{EngineConfig, NegotiationEngine, NegotiationState, RtcSessionDescription};

proptest! {
    #[test]
    fn parser_never_panics(text in "\\PC{0,400}") {
        let _ = parse_sdp(&text);
    }

    #[test]
    fn written_sections_parse_back(
        media in prop::sample::select(vec!["audio", "video"]),
        port in 1u16..,
        formats in prop::collection::vec("[0-9]{1,3}", 1..5),
        values in prop::collection::vec("[a-z0-9=;/ -]{1,20}", 0..5),
    ) {
        let mut sdp = SessionDescription::new("- 1 1 IN IP4 127.0.0.1");
        let mut section = MediaSection::new(media, port, "UDP/TLS/RTP/SAVPF", formats);
        for (i, value) in values.iter().enumerate() {
            section.push(Attribute::new(format!("x-attr{}", i), value.trim()));
        }
        sdp.media.push(section);

        let parsed = parse_sdp(&sdp.to_string()).unwrap();
        prop_assert_eq!(parsed, sdp);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn arbitrary_offer_text_is_an_error_not_a_panic(sdp in "[a-z]=[ -~]{0,40}(\r\n[a-z]=[ -~]{0,40}){0,12}") {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let offer = RtcSessionDescription::offer(sdp);
            let mut engine = NegotiationEngine::new(EngineConfig::local()).await.unwrap();
            if engine.set_remote_offer(&offer).await.is_err() {
                assert_eq!(engine.state(), NegotiationState::Fresh);
            }
            engine.close().await;
        });
    }
}
