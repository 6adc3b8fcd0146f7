/** md
# Parser

Reads one line at a time.
**/
pub fn parse(line: &str) -> usize {
    line.len()
}

// md
//
// ## Limits
//
// No nesting.
// end md
