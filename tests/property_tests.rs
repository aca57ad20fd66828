//! Property tests over generated script text.

use cscript_tools::call_context::ParserState;
use cscript_tools::lexer::Lexer;
use cscript_tools::{Preprocessor, Version};
use proptest::prelude::*;

/// Script-like text: words, literals, comment markers, directives and
/// line breaks in any order.
fn script_strategy() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        "[a-zA-Z_][a-zA-Z0-9_]{0,8}",
        "[0-9]{1,4}",
        Just(" ".to_string()),
        Just("\t".to_string()),
        Just("\n".to_string()),
        Just("\r\n".to_string()),
        Just("//".to_string()),
        Just("/*".to_string()),
        Just("*/".to_string()),
        Just("\"".to_string()),
        Just("'".to_string()),
        Just("\\".to_string()),
        Just("#define ".to_string()),
        Just("#undef ".to_string()),
        Just("#ifdef ".to_string()),
        Just("#ifver 3.".to_string()),
        Just("#else".to_string()),
        Just("#endif".to_string()),
        Just("#error ".to_string()),
        "[(){};,.=*\\[\\]]",
        Just("é".to_string()),
    ];
    prop::collection::vec(fragment, 0..64).prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn preprocessing_keeps_one_line_per_input_line(script in script_strategy()) {
        let mut preprocessor = Preprocessor::with_version(Version::new(3, 6, 0, 0));
        let output = preprocessor.preprocess(&script, "prop.asc");
        prop_assert_eq!(output.lines().count(), script.lines().count() + 1);
        prop_assert!(output.ends_with('\n'));
    }

    #[test]
    fn comment_spans_are_sorted_and_disjoint(script in script_strategy()) {
        let state = ParserState::with_comments(&script);
        let comments = state.comments();
        for &(start, end) in comments {
            prop_assert!(start < end && end <= script.len());
            prop_assert!(script[start..].starts_with('/'));
            prop_assert!(state.is_in_comment(start));
        }
        for pair in comments.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].0);
        }
    }

    #[test]
    fn call_context_is_a_suffix_of_the_text_before_the_cursor(script in script_strategy(), cursor in 0usize..512) {
        let mut cursor = cursor.min(script.len());
        while !script.is_char_boundary(cursor) {
            cursor -= 1;
        }
        let state = ParserState::with_comments(&script);
        for outer in [false, true] {
            let call = state.current_function_call(cursor, outer);
            prop_assert!(script[..cursor].ends_with(call));
        }
    }

    #[test]
    fn tokens_are_ordered_and_in_bounds(script in script_strategy()) {
        let tokens = Lexer::new(&script).tokenize();
        let mut previous_end = 0;
        for token in &tokens {
            prop_assert!(previous_end <= token.start && token.start <= token.end);
            prop_assert!(token.end <= script.len());
            previous_end = token.end;
        }
    }
}
