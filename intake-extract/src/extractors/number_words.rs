//! Spelled-out number parsing ("fifteen hundred", "two thousand five hundred")

/// A run of number words found in a token stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpelledNumber {
    pub value: f64,
    /// Index of the first token of the run
    pub start: usize,
    /// Index one past the last token of the run
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Word {
    Unit(u64),
    Tens(u64),
    Hundred,
    Thousand,
}

fn classify(token: &str) -> Option<Word> {
    let unit = match token {
        "zero" => Some(0),
        "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        "nine" => Some(9),
        "ten" => Some(10),
        "eleven" => Some(11),
        "twelve" => Some(12),
        "thirteen" => Some(13),
        "fourteen" => Some(14),
        "fifteen" => Some(15),
        "sixteen" => Some(16),
        "seventeen" => Some(17),
        "eighteen" => Some(18),
        "nineteen" => Some(19),
        _ => None,
    };
    if let Some(v) = unit {
        return Some(Word::Unit(v));
    }
    match token {
        "twenty" => Some(Word::Tens(20)),
        "thirty" => Some(Word::Tens(30)),
        "forty" | "fourty" => Some(Word::Tens(40)),
        "fifty" => Some(Word::Tens(50)),
        "sixty" => Some(Word::Tens(60)),
        "seventy" => Some(Word::Tens(70)),
        "eighty" => Some(Word::Tens(80)),
        "ninety" => Some(Word::Tens(90)),
        "hundred" => Some(Word::Hundred),
        "thousand" | "grand" => Some(Word::Thousand),
        _ => None,
    }
}

/// Expand hyphenated compounds ("twenty-five") into separate words
fn words_of(token: &str) -> Option<Vec<Word>> {
    token.split('-').map(classify).collect()
}

fn is_scale(token: Option<&&str>) -> bool {
    matches!(
        token.and_then(|t| classify(t)),
        Some(Word::Hundred) | Some(Word::Thousand)
    )
}

/// Running `(total, current, last word)` of a number run
type RunState = (u64, u64, Option<Word>);

/// Apply one word to a run, `None` when it cannot continue it
///
/// A scale word only scales a value below it ("hundred hundred" and
/// "five hundred hundred" end the run), and overflow ends the run.
fn step((total, current, last): RunState, word: Word) -> Option<RunState> {
    let fits = match (last, word) {
        (None, _) => true,
        (Some(Word::Unit(_)), Word::Unit(_) | Word::Tens(_)) => false,
        (Some(Word::Tens(_)), Word::Tens(_)) => false,
        (Some(Word::Tens(_)), Word::Unit(u)) => u < 10,
        (Some(Word::Hundred), Word::Hundred) => false,
        (Some(Word::Thousand), Word::Hundred | Word::Thousand) => false,
        (_, Word::Hundred) => current < 100,
        _ => true,
    };
    if !fits {
        return None;
    }
    let (total, current) = match word {
        Word::Unit(v) | Word::Tens(v) => (total, current.checked_add(v)?),
        Word::Hundred => (total, current.max(1).checked_mul(100)?),
        Word::Thousand => (total.checked_add(current.max(1).checked_mul(1000)?)?, 0),
    };
    Some((total, current, Some(word)))
}

/// Find every spelled-out number in a lower-cased token stream
///
/// Runs break where a reading would be ambiguous ("five five"), and "and" is
/// only absorbed between number words ("two hundred and fifty"). "a" counts
/// as one directly before a scale word ("a thousand").
pub fn find_spelled_numbers(tokens: &[&str]) -> Vec<SpelledNumber> {
    let mut found = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let starts_run = words_of(tokens[i]).is_some()
            || (tokens[i] == "a" && is_scale(tokens.get(i + 1)));
        if !starts_run {
            i += 1;
            continue;
        }

        let start = i;
        let mut total: u64 = 0;
        let mut current: u64 = 0;
        let mut last: Option<Word> = None;
        let mut end = i;

        while i < tokens.len() {
            let token = tokens[i];
            let words = if token == "a" && last.is_none() && is_scale(tokens.get(i + 1)) {
                Some(vec![Word::Unit(1)])
            } else if token == "and"
                && last.is_some()
                && tokens.get(i + 1).and_then(|t| words_of(t)).is_some()
            {
                i += 1;
                continue;
            } else {
                words_of(token)
            };
            let Some(words) = words else { break };

            let mut next = (total, current, last);
            let mut accepted = true;
            for word in &words {
                match step(next, *word) {
                    Some(state) => next = state,
                    None => {
                        accepted = false;
                        break;
                    }
                }
            }
            if !accepted {
                break;
            }
            (total, current, last) = next;
            i += 1;
            end = i;
        }

        if end > start {
            found.push(SpelledNumber {
                value: (total + current) as f64,
                start,
                end,
            });
            i = end;
        } else {
            i = start + 1;
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<f64> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        find_spelled_numbers(&tokens).iter().map(|n| n.value).collect()
    }

    #[test]
    fn test_simple_values() {
        assert_eq!(parse("five"), vec![5.0]);
        assert_eq!(parse("twenty-five"), vec![25.0]);
        assert_eq!(parse("twenty five"), vec![25.0]);
    }

    #[test]
    fn test_scaled_values() {
        assert_eq!(parse("fifteen hundred"), vec![1500.0]);
        assert_eq!(parse("two thousand five hundred"), vec![2500.0]);
        assert_eq!(parse("two hundred and fifty"), vec![250.0]);
        assert_eq!(parse("a thousand"), vec![1000.0]);
        assert_eq!(parse("three grand"), vec![3000.0]);
        assert_eq!(parse("twelve hundred fifty"), vec![1250.0]);
    }

    #[test]
    fn test_runs_break_on_ambiguity() {
        assert_eq!(parse("five five"), vec![5.0, 5.0]);
        assert_eq!(parse("need two weeks and three days"), vec![2.0, 3.0]);
    }

    #[test]
    fn test_positions() {
        let tokens: Vec<&str> = "i need fifteen hundred dollars".split_whitespace().collect();
        let found = find_spelled_numbers(&tokens);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start, 2);
        assert_eq!(found[0].end, 4);
    }

    #[test]
    fn test_repeated_scale_words_do_not_overflow() {
        let text = "hundred ".repeat(10);
        assert_eq!(parse(&text), vec![100.0; 10]);

        let chained = "one hundred ".repeat(12);
        let values = parse(&chained);
        assert_eq!(values.len(), 12);
        assert!(values.iter().all(|v| *v <= 101.0));

        let thousands = "a thousand thousand thousand";
        assert_eq!(parse(thousands), vec![1000.0, 1000.0, 1000.0]);
    }

    #[test]
    fn test_lone_article_is_not_a_number() {
        assert!(parse("a car").is_empty());
        assert!(parse("and").is_empty());
    }
}
