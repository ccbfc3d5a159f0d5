// Prompt constants for resume generation.

/// Sampling temperature of the resume writer.
pub const RESUME_TEMPERATURE: f32 = 0.3;

/// Resume writer prompt. Replace `{job_description}` before sending.
pub const RESUME_PROMPT_TEMPLATE: &str = r#"
You are an expert resume writer.

Based on the job description below, generate the most ideal resume tailored to this job.

Job Description:
"""
{job_description}
"""

The resume must include:

- Full Name
- Mobile Number
- LinkedIn Profile Link
- GitHub Profile Link
- Email ID

Education:
- List the most aligned degree.

Projects:
- Include 5–6 project titles and summaries that align closely with the job requirements.

Work Experience:
- Add highly relevant experiences based on the job description.

Skills (grouped as below):
- Programming Languages
- Web
- Database
- Tools / Frameworks / Platforms

Other Interests & Achievements:
- Add a few that would enhance the resume for this job.

Use markdown formatting for structure.
"#;

pub fn render_resume_prompt(job_description: &str) -> String {
    RESUME_PROMPT_TEMPLATE.replace("{job_description}", job_description)
}
