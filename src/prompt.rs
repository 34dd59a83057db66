// src/prompt.rs
//! System prompt composition from the active role and the selected source.

use crate::catalog::Source;
use crate::chat::UserRole;

const PREAMBLE: &str = "You are an AI analyst who helps users understand the maturity index of data sources.
The maturity index combines an assessment of a source's reliability, accuracy and completeness.";

const NO_SOURCE_NOTE: &str = "The user has not selected a source yet.";

const OWNER_GUIDANCE: &str = "As the owner of the source, the user needs concrete recommendations for improving its metrics.
Suggest practical steps that raise the maturity index. Focus on specific actions that fix the weak spots of the source.

If the user asks for code examples, provide them as fenced code blocks labeled with the programming language:
```python
# Python example
```

```sql
-- SQL query example
```

```javascript
// JavaScript example
```

Code examples must be practical and applicable to improving data quality.";

const REQUESTER_GUIDANCE: &str = "As a data requester, the user needs to understand how well the source meets their requirements.
Explain what the metrics mean and help interpret the maturity index to support decisions.";

/// Compose the system message prepended to every chat turn.
///
/// Layout: preamble with role label, then the source block (or a note that
/// nothing is selected), then role guidance.
pub fn build_system_prompt(role: UserRole, source: Option<&Source>) -> String {
    let mut out = format!("{PREAMBLE}\n\nUser role: {}", role.label());

    match source {
        Some(s) => {
            out.push_str("\n\nSelected source: ");
            out.push_str(&s.name);
            out.push_str(&format!("\n  Owner: {}", s.owner));
            out.push_str(&format!("\n  Overall maturity index: {}", s.score));
            out.push_str(&format!("\n  Reliability: {}", s.details.reliability));
            out.push_str(&format!("\n  Accuracy: {}", s.details.accuracy));
            out.push_str(&format!("\n  Completeness: {}", s.details.completeness));
        }
        None => {
            out.push_str("\n\n");
            out.push_str(NO_SOURCE_NOTE);
        }
    }

    out.push_str("\n\n");
    out.push_str(match role {
        UserRole::Owner => OWNER_GUIDANCE,
        UserRole::Requester => REQUESTER_GUIDANCE,
    });
    out
}
