//! Textual encoding of a hand record.
//!
//! A record is written as a bracketed list of 21 integer triples, e.g.
//! `[(0, 0, 0), (0, 0, 0), ...]`. There is no framing or versioning, one
//! record fills one datagram.

use crate::{
    error::Error,
    hand::{Landmark, Landmarks, DEFAULT_RECORD, NUM_LANDMARKS},
};
use std::fmt::Write;

pub(crate) fn encode_record(record: &Landmarks) -> String {
    let mut text = String::with_capacity(record.len() * 16);
    text.push('[');
    for (i, landmark) in record.iter().enumerate() {
        if i > 0 {
            text.push_str(", ");
        }
        // writing into a String cannot fail
        let _ = write!(text, "{}", landmark);
    }
    text.push(']');
    text
}

fn parse_coordinate(text: &str) -> Result<i32, Error> {
    let text = text.trim();
    text.parse()
        .map_err(|e| Error::ParseCoordinate(e, text.to_owned()))
}

fn parse_landmark(body: &str) -> Result<Landmark, Error> {
    let mut coordinates = body.split(',');
    let mut next = || {
        coordinates
            .next()
            .ok_or(Error::MalformedRecord("landmark has fewer than 3 coordinates"))
            .and_then(parse_coordinate)
    };
    let landmark = Landmark::new(next()?, next()?, next()?);
    if coordinates.next().is_some() {
        return Err(Error::MalformedRecord("landmark has more than 3 coordinates"));
    }
    Ok(landmark)
}

pub(crate) fn parse_record(text: &str) -> Result<Landmarks, Error> {
    let mut rest = text
        .trim()
        .strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .ok_or(Error::MalformedRecord("record is not enclosed in brackets"))?
        .trim();

    let mut record = DEFAULT_RECORD;
    let mut found = 0;

    while !rest.is_empty() {
        let (body, tail) = rest
            .strip_prefix('(')
            .and_then(|inner| inner.split_once(')'))
            .ok_or(Error::MalformedRecord("landmark is not enclosed in parentheses"))?;

        let landmark = parse_landmark(body)?;
        if let Some(slot) = record.get_mut(found) {
            *slot = landmark;
        }
        found += 1;

        rest = tail.trim_start();
        if let Some(after) = rest.strip_prefix(',') {
            rest = after.trim_start();
            if rest.is_empty() {
                return Err(Error::MalformedRecord("trailing comma"));
            }
        } else if !rest.is_empty() {
            return Err(Error::MalformedRecord("landmarks are not comma separated"));
        }
    }

    if found != NUM_LANDMARKS {
        return Err(Error::LandmarkCount {
            expected: NUM_LANDMARKS,
            found,
        });
    }
    Ok(record)
}

pub(crate) fn decode_datagram(payload: &[u8]) -> Result<Landmarks, Error> {
    parse_record(std::str::from_utf8(payload).map_err(Error::RecordEncoding)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Landmarks {
        let mut record = DEFAULT_RECORD;
        for (i, landmark) in record.iter_mut().enumerate() {
            let i = i as i32;
            *landmark = Landmark::new(i * 3, 720 - i * 40, -i);
        }
        record
    }

    mod encode_tests {
        use super::*;

        #[test]
        fn default_record() {
            let expected = format!("[{}]", vec!["(0, 0, 0)"; 21].join(", "));
            assert_eq!(encode_record(&DEFAULT_RECORD), expected);
        }

        #[test]
        fn negative_values() {
            let mut record = DEFAULT_RECORD;
            record[0] = Landmark::new(100, 670, 0);
            record[20] = Landmark::new(-4, -80, -12);
            let text = encode_record(&record);
            assert!(text.starts_with("[(100, 670, 0), (0, 0, 0),"));
            assert!(text.ends_with(", (-4, -80, -12)]"));
        }
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn reads_what_encode_writes() {
            assert_eq!(parse_record(&encode_record(&sample())).unwrap(), sample());
        }

        #[test]
        fn tolerates_whitespace() {
            let text = format!(" [ {} ] \n", vec!["( 1 ,2,  3 )"; 21].join(" ,"));
            let record = parse_record(&text).unwrap();
            assert!(record.iter().all(|&lm| lm == Landmark::new(1, 2, 3)));
        }

        #[test]
        fn too_few_landmarks() {
            let text = format!("[{}]", vec!["(0, 0, 0)"; 20].join(", "));
            assert!(matches!(
                parse_record(&text),
                Err(Error::LandmarkCount {
                    expected: 21,
                    found: 20
                })
            ));
        }

        #[test]
        fn too_many_landmarks() {
            let text = format!("[{}]", vec!["(0, 0, 0)"; 22].join(", "));
            assert!(matches!(
                parse_record(&text),
                Err(Error::LandmarkCount { found: 22, .. })
            ));
        }

        #[test]
        fn empty_list() {
            assert!(matches!(
                parse_record("[]"),
                Err(Error::LandmarkCount { found: 0, .. })
            ));
        }

        #[test]
        fn missing_brackets() {
            assert!(matches!(
                parse_record("(0, 0, 0)"),
                Err(Error::MalformedRecord(_))
            ));
        }

        #[test]
        fn wrong_arity() {
            assert!(matches!(
                parse_record("[(0, 0)]"),
                Err(Error::MalformedRecord(_))
            ));
            assert!(matches!(
                parse_record("[(0, 0, 0, 0)]"),
                Err(Error::MalformedRecord(_))
            ));
        }

        #[test]
        fn non_integer_coordinate() {
            assert!(matches!(
                parse_record("[(0.5, 0, 0)]"),
                Err(Error::ParseCoordinate(_, ref text)) if text == "0.5"
            ));
        }

        #[test]
        fn trailing_comma() {
            let text = format!("[{}, ]", vec!["(0, 0, 0)"; 21].join(", "));
            assert!(matches!(
                parse_record(&text),
                Err(Error::MalformedRecord("trailing comma"))
            ));
        }

        #[test]
        fn datagram_must_be_utf8() {
            assert!(matches!(
                decode_datagram(&[0xff, 0xfe]),
                Err(Error::RecordEncoding(_))
            ));
        }
    }
}
