//! Prompt pairs (system, user) for the three generation tasks.

const RESEARCH_NOTES_SYSTEM: &str = "You are a research assistant specializing in extracting and organizing information.

Your task is to synthesize search results into coherent research notes.";

const SYNTHESIS_SYSTEM: &str = "You are a senior educator and systems thinker.

Your task is to synthesize raw research into structured,
progressive, and teachable knowledge.

Focus on clarity, conceptual hierarchy, and learning flow.";

const LESSON_SYSTEM: &str = "You are an expert technical instructor.

Write clear, structured, and pedagogical lessons.
Assume the reader is intelligent but unfamiliar with the topic.";

/// Condense search results into research notes.
pub fn research_notes_prompt(topic: &str, target_audience: &str, search_results: &str) -> (String, String) {
    let user = format!(
        "Topic: {topic}
Target audience: {target_audience}

Search results:
{search_results}

Extract and organize the most important information about this topic.
Focus on:
- Key concepts and definitions
- Important technical details
- Common use cases and examples
- Best practices and patterns

Create comprehensive research notes in Markdown format.
Include all relevant information that would help create a complete course."
    );
    (RESEARCH_NOTES_SYSTEM.to_string(), user)
}

/// Turn research notes into a knowledge base ending in a lesson outline.
pub fn synthesis_prompt(topic: &str, raw_notes: &str) -> (String, String) {
    let user = format!(
        "Topic: {topic}

Raw research notes:
{raw_notes}

Tasks:
1. Organize concepts from fundamentals to advanced.
2. Explain relationships between concepts.
3. Identify common misconceptions.
4. Map concepts to lessons.

Output format (Markdown):
- Concept Map
- Learning Progression
- Key Insights
- Lesson Mapping

IMPORTANT: At the end of your response, provide a lesson outline in this exact format:
## LESSON OUTLINE
1. [Lesson title 1]
2. [Lesson title 2]
3. [Lesson title 3]
...

Each lesson title should be clear and progressive."
    );
    (SYNTHESIS_SYSTEM.to_string(), user)
}

/// Write one complete lesson.
pub fn lesson_prompt(
    topic: &str,
    lesson_title: &str,
    target_audience: &str,
    knowledge_base: &str,
) -> (String, String) {
    let user = format!(
        "Course topic: {topic}
Lesson title: {lesson_title}
Target audience: {target_audience}

Knowledge base:
{knowledge_base}

Write a complete lesson with the following structure:

1. Learning Objectives
2. Core Theory
3. Intuition & Examples
4. Common Pitfalls
5. Exercises
6. Further Reading

Output in Markdown.

QUALITY REQUIREMENTS:
- Logic must be coherent and progressive
- Explain from first principles
- Provide intuition, not just definitions
- Use accurate, meaningful examples
- Make it suitable for self-study"
    );
    (LESSON_SYSTEM.to_string(), user)
}
