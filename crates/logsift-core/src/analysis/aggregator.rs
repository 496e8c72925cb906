use super::{AggregateOutcome, SortKey, UrlSummary};
use crate::config::RunConfig;
use crate::log::{ParsedLine, parse_line};
use crate::{Error, Result};
use std::collections::HashMap;
use std::io;

/// Request times seen for one URL, in stream order
struct UrlStats {
    url: String,
    times: Vec<f64>,
}

/// Streams log lines into ranked per-URL timing summaries
pub struct LogAggregator {
    min_quality: f64,
    sort_by: SortKey,
}

impl LogAggregator {
    pub fn new(min_quality: f64, sort_by: SortKey) -> Self {
        Self {
            min_quality,
            sort_by,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.min_quality, config.sort_by)
    }

    /// Aggregate in-memory lines
    pub fn aggregate<I, S>(&self, lines: I) -> Result<AggregateOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.try_aggregate(lines.into_iter().map(Ok::<S, io::Error>))
    }

    /// Aggregate lines from a fallible source such as [`crate::log::LogLines`]
    ///
    /// Consumes the source once. A read error stops the run; lines that fail
    /// to parse only lower the quality ratio.
    pub fn try_aggregate<I, S>(&self, lines: I) -> Result<AggregateOutcome>
    where
        I: IntoIterator<Item = io::Result<S>>,
        S: AsRef<str>,
    {
        tracing::debug!("Aggregating log lines, sorted by {}", self.sort_by);

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut stats: Vec<UrlStats> = Vec::new();
        let mut total_lines = 0usize;
        let mut valid_lines = 0usize;
        let mut total_time = 0.0f64;

        for line in lines {
            let line = line?;
            total_lines += 1;

            match parse_line(line.as_ref()) {
                ParsedLine::Valid { url, request_time } => {
                    let slot = match index.get(url) {
                        Some(&slot) => slot,
                        None => {
                            index.insert(url.to_string(), stats.len());
                            stats.push(UrlStats {
                                url: url.to_string(),
                                times: Vec::new(),
                            });
                            stats.len() - 1
                        }
                    };
                    stats[slot].times.push(request_time);
                    valid_lines += 1;
                    total_time += request_time;
                }
                ParsedLine::Invalid(reason) => {
                    tracing::debug!("Skipping line {}: {}", total_lines, reason.as_str());
                }
            }
        }

        if total_lines == 0 {
            return Err(Error::EmptyLog);
        }

        let ratio = valid_lines as f64 / total_lines as f64;
        if ratio < self.min_quality {
            tracing::debug!(
                "{} of {} lines parsed, below minimum quality {}",
                valid_lines,
                total_lines,
                self.min_quality
            );
            return Err(Error::Quality {
                ratio,
                threshold: self.min_quality,
            });
        }

        let mut summaries: Vec<UrlSummary> = stats
            .iter()
            .filter_map(|s| UrlSummary::from_samples(&s.url, &s.times, valid_lines, total_time))
            .collect();

        // stable: equal metrics keep first-seen order
        let key = self.sort_by;
        summaries.sort_by(|a, b| b.metric(key).total_cmp(&a.metric(key)));

        tracing::info!(
            "Aggregation complete: {} urls from {} of {} lines (quality {:.3})",
            summaries.len(),
            valid_lines,
            total_lines,
            ratio
        );

        Ok(AggregateOutcome {
            summaries,
            total_lines,
            valid_lines,
            total_time,
        })
    }
}

impl Default for LogAggregator {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{median, round3};

    const LOGS: [&str; 11] = [
        r#"1.168.65.96 -  - [29/Jun/2017:03:50:22 +0300] "GET /api/v2/internal/banner/24294027/info HTTP/1.1" 200 407 "-" "-" "-" "1498697422-2539198130-4709-9928846" "89f7f1be37d" 0.146"#,
        r#"1.169.137.128 -  - [29/Jun/2017:03:50:22 +0300] "GET /api/v2/group/1769230/banners HTTP/1.1" 200 1020 "-" "Configovod" "-" "1498697422-2118016444-4708-9752747" "712e90144abee9" 0.628"#,
        r#"1.194.135.240 -  - [29/Jun/2017:03:50:22 +0300] "GET /api/v2/group/7786679/statistic/sites/?date_type=day&date_from=2017-06-28&date_to=2017-06-28 HTTP/1.1" 200 22 "-" "python-requests/2.13.0" "-" "1498697422-3979856266-4708-9752772" "8a7741a54297568b" 0.067"#,
        r#"1.169.137.128 -  - [29/Jun/2017:03:50:22 +0300] "GET /api/v2/banner/1717161 HTTP/1.1" 200 2116 "-" "Slotovod" "-" "1498697422-2118016444-4708-9752771" "712e90144abee9" 0.138"#,
        r#"1.166.85.48 -  - [29/Jun/2017:03:50:22 +0300] "GET /export/appinstall_raw/2017-06-29/ HTTP/1.0" 200 28358 "-" "Mozilla/5.0 (Windows; U; Windows NT 6.0; ru; rv:1.9.0.12) Gecko/2009070611 Firefox/3.0.12 (.NET CLR 3.5.30729)" "-" "-" "-" 0.003"#,
        r#"1.199.4.96 -  - [29/Jun/2017:03:50:22 +0300] "GET /api/v2/slot/4822/groups HTTP/1.1" 200 22 "-" "Lynx/2.8.8dev.9 libwww-FM/2.14 SSL-MM/1.4.1 GNUTLS/2.10.5" "-" "1498697422-3800516057-4708-9752773" "2a828197ae235b0b3cb" 0.157"#,
        r#"1.195.208.16 -  - [29/Jun/2017:03:50:23 +0300] "GET /api/v2/test/auth/ HTTP/1.0" 401 55 "https://rb.mail.ru/api/v2/test/auth/" "MR HTTP Monitor" "-" "1498697423-1957913694-4708-9752786" "-" 0.003"#,
        r#"1.195.28.16 -  - [29/Jun/2017:03:50:23 +0300] "GET /accounts/login/ HTTP/1.0" 200 9982 "https://rb.mail.ru/accounts/login/" "MR HTTP Monitor" "-" "1498697423-1957913694-4708-9752785" "-" 0.035"#,
        r#"1.200.76.128 f032b48fb33e1e692  - [29/Jun/2017:03:50:23 +0300] "GET /api/1/banners/?campaign=7789704 HTTP/1.1" 200 604049 "-" "-" "-" "1498697421-4102637017-4708-9752733" "-" 2.577"#,
        r#"1.196.116.32 -  - [29/Jun/2017:03:50:23 +0300] "GET /api/v2/banner/25040266 HTTP/1.1" 200 984 "-" "Lynx/2.8.8dev.9 libwww-FM/2.14 SSL-MM/1.4.1 GNUTLS/2.10.5" "-" "1498697422-2190034393-4708-9752765" "dc7161be3" 1.680"#,
        "scdscdsdc",
    ];

    fn line(url: &str, time: f64) -> String {
        format!(
            r#"1.196.116.32 -  - [29/Jun/2017:03:50:23 +0300] "GET {url} HTTP/1.1" 200 984 "-" "-" "-" "-" "-" {time}"#
        )
    }

    /// All sample lines except the garbage one, i.e. ten valid lines
    fn valid_sample() -> Vec<&'static str> {
        LOGS[..10].to_vec()
    }

    #[test]
    fn test_quality_gate_passes_at_ninety_percent() {
        let mut lines = valid_sample();
        lines[9] = "scdscdsdc";

        let outcome = LogAggregator::new(0.89, SortKey::TimeSum)
            .aggregate(lines)
            .unwrap();
        assert_eq!(outcome.total_lines, 10);
        assert_eq!(outcome.valid_lines, 9);
        assert_eq!(outcome.quality(), 0.9);
    }

    #[test]
    fn test_quality_gate_fails_above_ratio() {
        let mut lines = valid_sample();
        lines[9] = "scdscdsdc";

        let result = LogAggregator::new(0.95, SortKey::TimeSum).aggregate(lines);
        match result {
            Err(Error::Quality { ratio, threshold }) => {
                assert_eq!(ratio, 0.9);
                assert_eq!(threshold, 0.95);
            }
            other => panic!("expected quality error, got {:?}", other),
        }
    }

    #[test]
    fn test_quality_error_message_contains_ratio() {
        let err = LogAggregator::new(0.999, SortKey::TimeSum)
            .aggregate(LOGS)
            .unwrap_err();
        assert!(err.to_string().contains("0.909"));
    }

    #[test]
    fn test_all_invalid_lines_fail() {
        let result = LogAggregator::new(0.5, SortKey::TimeSum).aggregate(["a", "b c"]);
        assert!(matches!(result, Err(Error::Quality { ratio, .. }) if ratio == 0.0));
    }

    #[test]
    fn test_empty_input_fails() {
        let result = LogAggregator::default().aggregate(Vec::<String>::new());
        assert!(matches!(result, Err(Error::EmptyLog)));
    }

    #[test]
    fn test_read_error_aborts() {
        let lines: Vec<io::Result<String>> = vec![
            Ok(line("/a", 1.0)),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated gzip")),
        ];
        let result = LogAggregator::default().try_aggregate(lines);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_rank_by_time_sum() {
        let lines = vec![
            line("/a", 3.0),
            line("/a", 3.0),
            line("/b", 7.5),
            line("/a", 4.0),
            line("/b", 7.5),
        ];

        let outcome = LogAggregator::new(0.0, SortKey::TimeSum)
            .aggregate(&lines)
            .unwrap();
        let urls: Vec<&str> = outcome.summaries.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["/b", "/a"]);
        assert_eq!(outcome.summaries[0].time_sum, 15.0);
        assert_eq!(outcome.summaries[1].time_sum, 10.0);
        assert_eq!(outcome.summaries[1].count, 3);
    }

    #[test]
    fn test_rank_by_count() {
        let lines = vec![line("/a", 3.0), line("/a", 3.0), line("/b", 7.5)];

        let outcome = LogAggregator::new(0.0, SortKey::Count)
            .aggregate(&lines)
            .unwrap();
        assert_eq!(outcome.summaries[0].url, "/a");
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let lines = vec![
            line("/c", 1.0),
            line("/a", 1.0),
            line("/b", 2.0),
            line("/d", 1.0),
        ];

        let outcome = LogAggregator::new(0.0, SortKey::TimeSum)
            .aggregate(&lines)
            .unwrap();
        let urls: Vec<&str> = outcome.summaries.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["/b", "/c", "/a", "/d"]);
    }

    #[test]
    fn test_percentages_round_ties_to_even() {
        let mut lines = vec![line("/one", 0.5)];
        lines.extend((0..5).map(|_| line("/five", 0.25)));
        lines.extend((0..10).map(|_| line("/ten", 0.0)));

        let outcome = LogAggregator::new(0.0, SortKey::Count)
            .aggregate(&lines)
            .unwrap();
        let find = |url: &str| outcome.summaries.iter().find(|s| s.url == url).unwrap();

        assert_eq!(find("/one").count_perc, 0.062);
        assert_eq!(find("/five").count_perc, 0.312);
        assert_eq!(find("/ten").count_perc, 0.625);
        // 1.25 of the 1.75 total
        assert_eq!(find("/five").time_perc, 0.714);
        assert_eq!(find("/five").time_avg, 0.25);
    }

    #[test]
    fn test_count_perc_sums_to_one() {
        let outcome = LogAggregator::default().aggregate(LOGS).unwrap();
        let total: f64 = outcome.summaries.iter().map(|s| s.count_perc).sum();
        let tolerance = 0.0005 * outcome.summaries.len() as f64;
        assert!((total - 1.0).abs() <= tolerance, "count_perc sum was {}", total);

        let time_total: f64 = outcome.summaries.iter().map(|s| s.time_perc).sum();
        assert!((time_total - 1.0).abs() <= tolerance, "time_perc sum was {}", time_total);
    }

    #[test]
    fn test_summaries_rederivable_from_samples() {
        let lines = vec![
            line("/a", 0.146),
            line("/b", 0.628),
            line("/a", 0.067),
            line("/a", 1.68),
            line("/b", 0.003),
            line("/a", 2.577),
        ];
        let outcome = LogAggregator::new(0.0, SortKey::TimeAvg)
            .aggregate(&lines)
            .unwrap();

        let samples_a = [0.146, 0.067, 1.68, 2.577];
        let samples_b = [0.628, 0.003];
        let total: f64 = [0.146, 0.628, 0.067, 1.68, 0.003, 2.577].iter().sum();

        for (url, samples) in [("/a", &samples_a[..]), ("/b", &samples_b[..])] {
            let summary = outcome.summaries.iter().find(|s| s.url == url).unwrap();
            let expected = UrlSummary::from_samples(url, samples, 6, total).unwrap();
            assert_eq!(*summary, expected);

            let sum: f64 = samples.iter().sum();
            assert_eq!(summary.count, samples.len());
            assert_eq!(summary.time_sum, sum);
            assert_eq!(summary.time_avg, round3(sum / samples.len() as f64));
            assert_eq!(summary.time_med, median(samples).unwrap());
            assert_eq!(summary.count_perc, round3(samples.len() as f64 / 6.0));
        }

        assert_eq!(outcome.summaries[0].url, "/a");
        assert_eq!(outcome.summaries[0].time_med, (0.146 + 1.68) / 2.0);
        assert_eq!(outcome.summaries[0].time_max, 2.577);
    }

    #[test]
    fn test_sample_log_summary() {
        let outcome = LogAggregator::default().aggregate(LOGS).unwrap();

        assert_eq!(outcome.total_lines, 11);
        assert_eq!(outcome.valid_lines, 10);
        assert_eq!(outcome.summaries.len(), 10);

        let top = &outcome.summaries[0];
        assert_eq!(top.url, "/api/1/banners/?campaign=7789704");
        assert_eq!(top.time_sum, 2.577);
        assert_eq!(top.count_perc, 0.1);
    }

    #[test]
    fn test_outcome_top_truncates() {
        let outcome = LogAggregator::default().aggregate(LOGS).unwrap();
        assert_eq!(outcome.top(3).len(), 3);
        assert_eq!(outcome.top(100).len(), 10);
    }
}
