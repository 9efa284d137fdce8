//! Test fixtures for integration tests
//!
//! Provides sample board, ranking and API payloads plus profile helpers

use jobharvest::connectors::{BoardProfile, CardSelectors};

/// Ranking page served by the static employer driver
pub const RANKING_URL: &str = "https://ranking.test/top100";

/// Careers page of the seeded employer
pub const ACME_CAREERS_URL: &str = "https://acme.test/careers";

/// Board search template served by the static board driver
pub const BOARD_SEARCH_TEMPLATE: &str = "https://board.test/search?q={keywords}&l={location}";

/// The template rendered for keywords `graduate` in `London`
pub const BOARD_SEARCH_URL: &str = "https://board.test/search?q=graduate&l=London";

/// Ranking table listing three employers and one too-short name
pub const RANKING_HTML: &str = r#"
<!DOCTYPE html>
<html>
<body>
    <table>
        <thead><tr><th>Rank</th><th>Employer</th></tr></thead>
        <tbody>
            <tr><td>1</td><td class="employer-name">Acme</td></tr>
            <tr><td>2</td><td class="employer-name">Globex   Corporation</td></tr>
            <tr><td>3</td><td class="employer-name">Amazon Studios Ltd</td></tr>
            <tr><td>4</td><td class="employer-name">Z</td></tr>
        </tbody>
    </table>
</body>
</html>
"#;

/// Board results page with two complete cards
pub const BOARD_RESULTS_HTML: &str = r#"
<!DOCTYPE html>
<html>
<body>
    <ul class="results">
        <li class="job">
            <h3>Graduate Software Engineer</h3>
            <span class="company">Initech</span>
            <span class="loc">London</span>
            <a href="/jobs/101?trk=search">View</a>
            <p class="summary">Write and ship code</p>
        </li>
        <li class="job">
            <h3>Graduate Data Analyst</h3>
            <span class="company">Globex Corporation</span>
            <span class="loc">Manchester</span>
            <a href="/jobs/102">View</a>
            <p class="summary">Dashboards and SQL</p>
        </li>
    </ul>
</body>
</html>
"#;

/// Board results page linking to a second page
pub const BOARD_PAGE_ONE_HTML: &str = r#"
<html>
<head><link rel="next" href="/search?q=graduate&l=London&page=2"></head>
<body>
    <ul>
        <li class="job"><h3>Graduate Analyst</h3><span class="company">Acme</span>
            <a href="/jobs/1">View</a></li>
        <li class="job"><h3>Graduate Engineer</h3><span class="company">Globex</span>
            <a href="/jobs/2">View</a><p class="summary">Build things</p></li>
    </ul>
</body>
</html>
"#;

/// Second results page
pub const BOARD_PAGE_TWO_HTML: &str = r#"
<html>
<body>
    <ul>
        <li class="job"><h3>Trainee Actuary</h3><span class="company">Initech</span>
            <a href="/jobs/3">View</a><p class="summary">Numbers</p></li>
    </ul>
</body>
</html>
"#;

/// Detail page for a posting whose card had no summary
pub const BOARD_DETAIL_HTML: &str = r#"
<html>
<body>
    <div class="description">
        <p>Join our graduate analyst programme.</p>
    </div>
</body>
</html>
"#;

/// Job-search API response with one full and one sparse result
pub const API_RESPONSE_JSON: &str = r#"{
    "count": 2,
    "results": [
        {
            "title": "Graduate Data Scientist",
            "company": {"display_name": "Hooli"},
            "location": {"display_name": "Cambridge"},
            "redirect_url": "https://www.adzuna.co.uk/jobs/land/ad/4242?se=abc",
            "description": "Models and experiments",
            "created": "2024-03-01T08:00:00Z",
            "contract_time": "full_time"
        },
        {
            "title": "Junior Consultant",
            "company": {"display_name": "Vandelay"}
        }
    ]
}"#;

/// Profile reading the fixture board markup
pub fn board_profile(search_url: &str) -> BoardProfile {
    BoardProfile {
        enabled: true,
        search_url: search_url.to_string(),
        containers: vec!["li.job-card".to_string(), "li.job".to_string()],
        fields: CardSelectors {
            title: vec!["h3".to_string()],
            company: vec![".company".to_string()],
            location: vec![".loc".to_string()],
            url: vec!["a@href".to_string()],
            description: vec!["p.summary".to_string()],
            ..Default::default()
        },
        detail_description: vec!["div.description".to_string()],
        scroll_cycles: 2,
        scroll_pause_ms: 0,
        wait_timeout_ms: 0,
        posting_params: Vec::new(),
    }
}
