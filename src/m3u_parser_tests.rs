//! Tests for M3U playlist parsing

#[cfg(test)]
mod tests {
    use crate::m3u_parser::*;
    use crate::models::Channel;

    #[test]
    fn test_parse_m3u() {
        let content = r#"
#EXTM3U
#EXTINF:-1 tvg-id="cnn" group-title="News",CNN
http://example.com/live/1.ts
#EXTINF:-1 tvg-id="bbc" group-title="News",BBC
https://example.com/live/2.m3u8
"#;
        let channels = parse_m3u(content);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].name, "CNN");
        assert_eq!(channels[0].url, "http://example.com/live/1.ts");
        assert_eq!(channels[1].name, "BBC");
        assert_eq!(channels[1].url, "https://example.com/live/2.m3u8");
    }

    #[test]
    fn test_tvg_name_wins_over_comma_name() {
        let content = "#EXTINF:-1 tvg-name=\"BBC One\",BBC One HD\nhttps://example.com/bbc.m3u8\n";
        let channels = parse_m3u(content);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "BBC One");
        assert_eq!(channels[0].url, "https://example.com/bbc.m3u8");
    }

    #[test]
    fn test_name_after_last_comma_is_trimmed() {
        let content = "#EXTINF:-1 group-title=\"A,B\",  Spaced Name  \nhttp://example.com/a\n";
        let channels = parse_m3u(content);
        assert_eq!(channels[0].name, "Spaced Name");
    }

    #[test]
    fn test_empty_name_gets_placeholder() {
        let content = r#"#EXTM3U
#EXTINF:-1,First
http://example.com/1
#EXTINF:-1,
http://example.com/2
#EXTINF:-1,Third
http://example.com/3
#EXTINF:-1,
http://example.com/4
"#;
        let channels = parse_m3u(content);
        assert_eq!(channels.len(), 4);
        assert_eq!(channels[1].name, "Channel 2");
        assert_eq!(channels[3].name, "Channel 4");
    }

    #[test]
    fn test_placeholder_counts_only_parsed_entries() {
        // The dropped first block must not advance the ordinal
        let content = r#"#EXTINF:-1,Broken
not-a-url
#EXTINF:-1,
http://example.com/only
"#;
        let channels = parse_m3u(content);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Channel 1");
    }

    #[test]
    fn test_empty_tvg_name_falls_back_to_comma_name() {
        let content = "#EXTINF:-1 tvg-name=\"\",Comma Name\nhttp://example.com/x\n";
        let channels = parse_m3u(content);
        assert_eq!(channels[0].name, "Comma Name");
    }

    #[test]
    fn test_entry_followed_by_blank_line_is_dropped() {
        let content = r#"#EXTINF:-1,Some Channel

http://example.com/orphan
#EXTINF:-1,Good
http://example.com/good
"#;
        let channels = parse_m3u(content);
        assert_eq!(channels, vec![Channel::new("Good", "http://example.com/good")]);
    }

    #[test]
    fn test_entry_followed_by_extinf_rescans_next_line() {
        let content = r#"#EXTINF:-1,Some Channel
#EXTINF:-1,Real Channel
rtmp://example.com/live
"#;
        let channels = parse_m3u(content);
        assert_eq!(channels, vec![Channel::new("Real Channel", "rtmp://example.com/live")]);
    }

    #[test]
    fn test_truncated_document() {
        assert!(parse_m3u("#EXTM3U\n#EXTINF:-1,Last").is_empty());
        assert!(parse_m3u("").is_empty());
        assert!(parse_m3u("\n\n\n").is_empty());
    }

    #[test]
    fn test_unrecognized_schemes_and_directives() {
        let content = r#"#EXTM3U x-tvg-url="http://example.com/epg.xml"
#EXTINF:-1,UDP
udp://@233.50.230.1:5000
#EXTINF:-1,Relative
segment0.ts
#EXTGRP:News
#EXTINF:-1,Rtsp
rtsp://example.com/cam
http://example.com/not-preceded-by-extinf
"#;
        let channels = parse_m3u(content);
        assert_eq!(channels, vec![Channel::new("Rtsp", "rtsp://example.com/cam")]);
    }

    #[test]
    fn test_scheme_is_case_sensitive() {
        let content = "#EXTINF:-1,Upper\nHTTP://example.com/x\n";
        assert!(parse_m3u(content).is_empty());
    }

    #[test]
    fn test_consumed_url_line_not_rescanned() {
        // A URL line is never the start of another entry, even when the
        // following line is a URL too
        let content = "#EXTINF:-1,A\nhttp://example.com/a\nhttp://example.com/b\n";
        let channels = parse_m3u(content);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].url, "http://example.com/a");
    }

    #[test]
    fn test_crlf_line_endings() {
        let content = "#EXTM3U\r\n#EXTINF:-1,Windows Channel\r\nhttp://example.com/win.m3u8\r\n";
        let channels = parse_m3u(content);
        assert_eq!(channels, vec![Channel::new("Windows Channel", "http://example.com/win.m3u8")]);
    }

    #[test]
    fn test_round_trip_through_minimal_format() {
        let original = vec![
            Channel::new("Alpha", "http://example.com/alpha.m3u8"),
            Channel::new("Beta TV", "https://example.com/beta"),
            Channel::new("Gamma", "rtmp://example.com/gamma"),
            Channel::new("Delta", "rtsp://example.com/delta"),
        ];
        let document = to_m3u(&original);
        assert!(document.starts_with("#EXTM3U\n"));
        assert_eq!(parse_m3u(&document), original);
    }

    #[test]
    fn test_to_m3u_empty() {
        assert_eq!(to_m3u(&[]), "#EXTM3U\n");
    }
}
