/// System prompt for the per-team scouting summary.
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are asked to analyze the performance of a certain robot.

First, check whether a robot exists. If a robot does not exist, do not analyze.

Second, consider the categories below:
1. Autonomous performance: How many amp/speaker shots can each robot make, and how reliable is it?
    How often does the robot leave the starting zone? How often did the robot access the notes in the middle of the field?
2. Speaker performance: How consistently is the robot able to shoot into the speaker with low cycle times?
    How flexible was the robot with shooting from certain locations?
3. Amp performance: How consistently is the robot able to shoot into the amp with low cycle times?
4. Dead time: How much time was the robot dead or broken?
5. Endgame: How reliably does a robot park? How reliably does a robot climb? Distinguish between parking and climbing.
6. Trap: How often does the robot trap?
7. Type of robot: How often did the robot play offense or defense? Did the robot mostly shoot into speaker or amp?
8. Defense: How often did the robot play defense?
9. Additional Comments: What additional information do the comments reveal?

Do not draw conclusions or make assumptions from this data. Make sure data comes from the correct column.

Summarize your response in a series of markdown bullet points, no headings. Don't include "team x has a robot.""#;

/// System prompt for picklist generation.
pub const PICKLIST_SYSTEM_PROMPT: &str = r#"Create a single picklist of robots. Make sure to include ALL robots in the context.

General criteria for higher-ranking robots:
- Able to exit their starting area during autonomous
- High scoring (in either the amp and the speaker) during the autonomous period, with good accuracy
- If they are a speaker robot, then they have good accuracy when shooting into the speaker during the teleoperated period and ideally high-scoring too.
- If they are an amp robot, then they have good accuracy when shooting into the amp during the teleoperated period and ideally high-scoring too.
- If they are a defense robot, then they have a high percentage of time on defense.
- They are never dead or broken, or only die in one or two very early matches in the competition.
- They are flexible with where they are able to shoot from.

You do not have to be rigid with these criteria, as the user will be more specific with what criteria
they want when picking a robot."#;

pub fn analysis_prompt(team_number: &str) -> String {
    format!(
        "Please analyze the performance of team {}. Only focus on this team, make sure team_number metadata matches. \
         Do not use data from other teams. Do not say obvious statements like \"Team x has a robot.\"",
        team_number
    )
}

pub fn comparison_prompt(first: &str, second: &str) -> String {
    format!(
        "Please compare the performance of team {} to team {}. Only focus on these teams. \
         Do not use data from other teams. Make a recommendation on which team you would pick over the other.",
        first, second
    )
}

/// Ranking instruction for the picklist engine call.
///
/// Always names every team it was given; preference clauses are added only
/// for non-blank input.
#[derive(Debug, Clone, Default)]
pub struct PicklistPromptBuilder {
    teams: Vec<String>,
    wanted: Option<String>,
    unwanted: Option<String>,
}

impl PicklistPromptBuilder {
    /// `teams` is used in the order given.
    pub fn new(teams: Vec<String>) -> Self {
        Self {
            teams,
            ..Self::default()
        }
    }

    pub fn wanted(mut self, criteria: &str) -> Self {
        self.wanted = non_blank(criteria);
        self
    }

    pub fn unwanted(mut self, criteria: &str) -> Self {
        self.unwanted = non_blank(criteria);
        self
    }

    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn team_list(&self) -> String {
        self.teams.join(", ")
    }

    pub fn build(&self) -> String {
        let mut parts = vec![
            format!("These are the current teams {}.", self.team_list()),
            "Based on the context, create a picklist of teams, best to worst.".to_string(),
        ];
        if let Some(wanted) = &self.wanted {
            parts.push(format!("{} is important.", wanted));
        }
        if let Some(unwanted) = &self.unwanted {
            parts.push(format!("{} is not important.", unwanted));
        }
        parts.push("Make sure to include all teams.".to_string());
        parts.join(" ")
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
