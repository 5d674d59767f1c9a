// src/advisor/prompts.rs
//! Prompt templates, one per advisory kind. The aggregated context always goes last.

pub const PREAMBLE: &str = "You are a fantasy cricket expert advisor for IPL.\n";

pub fn player(player: &str, context: &str) -> String {
    format!(
        "{PREAMBLE}Based on the following information about {player}, should I include them in my fantasy team?\n\
         Include strengths, weaknesses, and specific statistics.\n\n{context}"
    )
}

pub fn team(team: &str, context: &str) -> String {
    format!(
        "{PREAMBLE}Based on the following information about {team}, which players from this team should I consider for my fantasy team?\n\
         List the top 3-5 players with reasons:\n\n{context}"
    )
}

pub fn captain<S: AsRef<str>>(players: &[S], context: &str) -> String {
    let names = players
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{PREAMBLE}Given these players: {names}, who should I select as captain for my fantasy team?\n\
         Compare their recent form with statistics:\n\n{context}"
    )
}

pub fn match_up(team1: &str, team2: &str, context: &str) -> String {
    format!(
        "{PREAMBLE}Analyze the upcoming match between {team1} and {team2}. \
         Provide fantasy recommendations including key players from both teams.\n\n{context}"
    )
}
