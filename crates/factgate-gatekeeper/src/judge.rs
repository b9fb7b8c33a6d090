//! Uniqueness judge adapter
//!
//! Replays accepted history to the judge oracle as a chat transcript and
//! reads back a strict verdict.

use crate::GatekeeperError;
use factgate_domain::traits::JudgeOracle;
use factgate_domain::{ChatMessage, FactRecord, Verdict};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Instruction turn that opens every transcript
pub const JUDGE_INSTRUCTION: &str = "You are a judge. I tell you a unique fact I know about the Scroll blockchain, \
and you verify the accuracy and originality of the fact. If it's verified and unique, you simply say 'YES'; \
otherwise, you say 'NO.' If I provide a question, a command,  an exclamation or a conditional sentence or any \
non-factual statement, you must respond 'NO.' Your responses will always be limited to 'YES' or 'NO.'";

/// The only reply that counts as acceptance
pub const ACCEPT_REPLY: &str = "YES.";

/// Build the judge transcript for a candidate statement
///
/// The instruction turn, then each prior record as a user turn followed by
/// an `"YES."` assistant turn (in the order given), then the candidate.
pub fn build_transcript(prior: &[FactRecord], candidate: &str) -> Vec<ChatMessage> {
    let mut transcript = Vec::with_capacity(prior.len() * 2 + 2);
    transcript.push(ChatMessage::system(JUDGE_INSTRUCTION));
    for record in prior {
        transcript.push(ChatMessage::user(record.statement.clone()));
        transcript.push(ChatMessage::assistant(ACCEPT_REPLY));
    }
    transcript.push(ChatMessage::user(candidate));
    transcript
}

/// Interpret a judge reply; anything but the exact accept token rejects
pub fn interpret(reply: &str) -> Verdict {
    if reply == ACCEPT_REPLY {
        Verdict::Accept
    } else {
        Verdict::Reject
    }
}

/// Judge adapter with a hard per-call deadline
pub struct UniquenessJudge<J> {
    oracle: J,
    deadline: Duration,
}

impl<J: JudgeOracle> UniquenessJudge<J> {
    /// Wrap an oracle with the given call deadline
    pub fn new(oracle: J, deadline: Duration) -> Self {
        Self { oracle, deadline }
    }

    /// The wrapped oracle
    pub fn oracle(&self) -> &J {
        &self.oracle
    }

    /// Ask the oracle whether `candidate` is accurate and unique given `prior`
    ///
    /// A deadline expiry is a `Reject` verdict. An oracle failure is an error,
    /// so the caller can leave state untouched.
    pub async fn judge(
        &self,
        prior: &[FactRecord],
        candidate: &str,
    ) -> Result<Verdict, GatekeeperError> {
        let transcript = build_transcript(prior, candidate);
        debug!("Judging candidate against {} prior facts", prior.len());

        match timeout(self.deadline, self.oracle.complete(&transcript)).await {
            Ok(Ok(reply)) => {
                let verdict = interpret(&reply);
                debug!("Judge replied {:?} -> {:?}", reply, verdict);
                Ok(verdict)
            }
            Ok(Err(e)) => Err(GatekeeperError::Judge(e.to_string())),
            Err(_) => {
                warn!("Judge did not reply within {:?}, rejecting", self.deadline);
                Ok(Verdict::Reject)
            }
        }
    }
}
